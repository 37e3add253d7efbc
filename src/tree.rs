//! Turns the flat list of tasks into an ordered, indented list of rows
//!
//! Tasks are linked to their parent through their `RELATED-TO` property.
//! Siblings are sorted by due date (earliest first, tasks without due date last), then by priority (most important first).
//! Children are displayed right after their parent, unless the parent is collapsed.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::item::TaskId;
use crate::task::Task;

/// Prefix of child rows
pub const CHILD_MARKER: &str = "↳";
/// Prefix of parent rows whose children are hidden
pub const COLLAPSED_MARKER: &str = "▸";
/// Prefix of parent rows whose children are displayed
pub const EXPANDED_MARKER: &str = "▾";

const INDENT: &str = "  ";
const DUE_FORMAT: &str = "%a %d/%m %H:%M";
const NO_DUE_LABEL: &str = "Not Set";


/// The set of parent tasks whose children are currently hidden
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollapseState {
    collapsed: HashSet<TaskId>,
}

impl CollapseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collapsed(&self, id: &TaskId) -> bool {
        self.collapsed.contains(id)
    }

    /// Flip the state of a task. Returns whether it is now collapsed
    pub fn toggle(&mut self, id: &TaskId) -> bool {
        if self.collapsed.remove(id) {
            false
        } else {
            self.collapsed.insert(id.clone());
            true
        }
    }

    pub fn collapse_all<I: IntoIterator<Item = TaskId>>(&mut self, ids: I) {
        self.collapsed.extend(ids);
    }

    pub fn is_empty(&self) -> bool {
        self.collapsed.is_empty()
    }
}


/// What to include in the tree
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreePolicy {
    /// Completed tasks are not displayed. Their children (if not completed themselves) are displayed as top-level tasks
    pub hide_completed: bool,
}

impl Default for TreePolicy {
    fn default() -> Self {
        Self { hide_completed: true }
    }
}


/// One line of the task list, ready to be displayed
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderRow {
    pub id: TaskId,
    /// The summary, with indentation and markers
    pub text: String,
    pub priority_label: String,
    pub status_label: String,
    pub due_label: String,
    pub depth: usize,
    pub is_parent: bool,
    pub is_collapsed: bool,
}


/// The IDs of the tasks that have at least one (displayed) child
pub fn parent_ids(tasks: &[Task], policy: TreePolicy) -> HashSet<TaskId> {
    Forest::new(tasks, policy).children.keys().map(|id| (*id).clone()).collect()
}

/// Build the rows to display.
///
/// This always terminates, even with inconsistent parent links: a task that is its own parent is a top-level task,
/// and in a cycle of tasks, the first one (in sort order) is displayed as a top-level task.
pub fn reconcile(tasks: &[Task], collapsed: &CollapseState, policy: TreePolicy) -> Vec<RenderRow> {
    let forest = Forest::new(tasks, policy);
    let roots = forest.roots();

    let mut rows = Vec::with_capacity(tasks.len());
    let mut path = HashSet::new();
    for root in roots {
        forest.emit(root, 0, collapsed, &mut path, &mut rows);
    }
    rows
}


struct Forest<'a> {
    /// Displayed tasks, in input order
    tasks: Vec<&'a Task>,
    /// Tasks with no (resolvable) parent
    natural_roots: Vec<&'a Task>,
    /// Sorted children of every parent
    children: HashMap<&'a TaskId, Vec<&'a Task>>,
}

impl<'a> Forest<'a> {
    fn new(all_tasks: &'a [Task], policy: TreePolicy) -> Self {
        let mut by_id: HashMap<&TaskId, &Task> = HashMap::new();
        let mut tasks = Vec::new();
        for task in all_tasks {
            if policy.hide_completed && task.completed() {
                continue;
            }
            if by_id.insert(task.id(), task).is_some() {
                log::warn!("Task {} is listed twice, ignoring the duplicate", task.id());
                continue;
            }
            tasks.push(task);
        }

        let mut natural_roots = Vec::new();
        let mut children: HashMap<&TaskId, Vec<&Task>> = HashMap::new();
        for &task in &tasks {
            match task.parent_id() {
                Some(parent) if parent != task.id() && by_id.contains_key(parent) => {
                    children.entry(parent).or_default().push(task);
                },
                _ => natural_roots.push(task),
            }
        }

        natural_roots.sort_by(|l, r| display_order(l, r));
        for siblings in children.values_mut() {
            siblings.sort_by(|l, r| display_order(l, r));
        }

        Self { tasks, natural_roots, children }
    }

    /// The top-level tasks, sorted.
    ///
    /// These are the natural roots, plus one task of every parent cycle that cannot be reached from them
    fn roots(&self) -> Vec<&'a Task> {
        let mut roots = self.natural_roots.clone();
        let mut reached = HashSet::new();
        for root in roots.iter().copied() {
            self.reach(root, &mut reached);
        }

        let mut unreached: Vec<&Task> = self.tasks.iter()
            .filter(|task| reached.contains(task.id()) == false)
            .cloned()
            .collect();
        unreached.sort_by(|l, r| display_order(l, r));
        for task in unreached {
            if reached.contains(task.id()) {
                continue;
            }
            log::debug!("Task {} is part of a parent cycle, displaying it as a top-level task", task.id());
            self.reach(task, &mut reached);
            roots.push(task);
        }

        roots.sort_by(|l, r| display_order(l, r));
        roots
    }

    /// Mark every task of the subtree, ignoring collapse state
    fn reach(&self, from: &'a Task, reached: &mut HashSet<&'a TaskId>) {
        let mut stack = vec![from];
        while let Some(task) = stack.pop() {
            if reached.insert(task.id()) == false {
                continue;
            }
            if let Some(children) = self.children.get(task.id()) {
                stack.extend(children.iter().cloned());
            }
        }
    }

    /// Depth-first emission. `path` holds the ancestors of `task`, so that cycles are not followed
    fn emit(&self, task: &'a Task, depth: usize, collapsed: &CollapseState,
            path: &mut HashSet<&'a TaskId>, rows: &mut Vec<RenderRow>)
    {
        let children = self.children.get(task.id());
        let is_parent = children.is_some();
        let is_collapsed = is_parent && collapsed.is_collapsed(task.id());
        rows.push(render_row(task, depth, is_parent, is_collapsed));

        let children = match children {
            Some(children) if is_collapsed == false => children,
            _ => return,
        };

        path.insert(task.id());
        for &child in children {
            if path.contains(child.id()) {
                continue;
            }
            self.emit(child, depth + 1, collapsed, path, rows);
        }
        path.remove(task.id());
    }
}

/// Earlier due dates first, no due date last. Then higher priorities first
fn display_order(left: &Task, right: &Task) -> Ordering {
    let due = match (left.due(), right.due()) {
        (Some(l), Some(r)) => l.cmp(r),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    due.then_with(|| right.priority().cmp(&left.priority()))
}

fn render_row(task: &Task, depth: usize, is_parent: bool, is_collapsed: bool) -> RenderRow {
    let mut text = String::new();
    if depth > 0 {
        text.push_str(&INDENT.repeat(depth));
        text.push_str(CHILD_MARKER);
        text.push(' ');
    }
    if is_parent {
        text.push_str(if is_collapsed { COLLAPSED_MARKER } else { EXPANDED_MARKER });
        text.push(' ');
    }
    text.push_str(task.summary());

    RenderRow {
        id: task.id().clone(),
        text,
        priority_label: task.priority().label().to_string(),
        status_label: task.status().label().to_string(),
        due_label: task.due()
            .map(|due| due.format(DUE_FORMAT).to_string())
            .unwrap_or_else(|| NO_DUE_LABEL.to_string()),
        depth,
        is_parent,
        is_collapsed,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::task::{Priority, TaskStatus};

    fn task(id: &str, due_day: Option<u32>, priority: Priority, parent: Option<&str>) -> Task {
        Task::new_with_parameters(
            TaskId::from(id),
            format!("Task {}", id),
            None,
            TaskStatus::NotStarted,
            priority,
            due_day.map(|day| Utc.ymd(2025, 1, day).and_hms(0, 0, 0)),
            parent.map(TaskId::from),
            Utc::now(),
        )
    }

    fn ids(rows: &[RenderRow]) -> Vec<&str> {
        rows.iter().map(|row| row.id.as_str()).collect()
    }

    fn expanded() -> CollapseState {
        CollapseState::new()
    }

    #[test]
    fn earlier_due_first() {
        let tasks = vec![
            task("later", Some(2), Priority::High, None),
            task("sooner", Some(1), Priority::Low, None),
        ];
        let rows = reconcile(&tasks, &expanded(), TreePolicy::default());
        assert_eq!(ids(&rows), vec!["sooner", "later"]);
        assert_eq!(rows[0].due_label, "Wed 01/01 00:00");
        assert_eq!(rows[0].priority_label, "Low");
        assert_eq!(rows[0].status_label, "Todo");
    }

    #[test]
    fn sibling_order() {
        let tasks = vec![
            task("none-high", None, Priority::High, None),
            task("d3-unset", Some(3), Priority::Unset, None),
            task("d3-low", Some(3), Priority::Low, None),
            task("d3-high", Some(3), Priority::High, None),
            task("d3-medium", Some(3), Priority::Medium, None),
            task("d2-low", Some(2), Priority::Low, None),
            task("none-unset", None, Priority::Unset, None),
        ];
        let rows = reconcile(&tasks, &expanded(), TreePolicy::default());
        assert_eq!(ids(&rows), vec!["d2-low", "d3-high", "d3-medium", "d3-low", "d3-unset", "none-high", "none-unset"]);
        assert_eq!(rows[6].due_label, "Not Set");
        assert_eq!(rows[6].priority_label, "Not Set");
    }

    #[test]
    fn equal_keys_keep_input_order() {
        let tasks = vec![
            task("first", Some(1), Priority::Low, None),
            task("second", Some(1), Priority::Low, None),
            task("third", Some(1), Priority::Low, None),
        ];
        let rows = reconcile(&tasks, &expanded(), TreePolicy::default());
        assert_eq!(ids(&rows), vec!["first", "second", "third"]);
    }

    #[test]
    fn children_follow_their_parent() {
        let tasks = vec![
            task("child-late", Some(9), Priority::Low, Some("parent")),
            task("other", Some(2), Priority::Low, None),
            task("parent", Some(1), Priority::Low, None),
            task("child-early", Some(5), Priority::Low, Some("parent")),
            task("grandchild", None, Priority::Low, Some("child-early")),
        ];
        let rows = reconcile(&tasks, &expanded(), TreePolicy::default());
        assert_eq!(ids(&rows), vec!["parent", "child-early", "grandchild", "child-late", "other"]);
        assert_eq!(rows.iter().map(|r| r.depth).collect::<Vec<_>>(), vec![0, 1, 2, 1, 0]);

        assert_eq!(rows[0].text, "▾ Task parent");
        assert!(rows[0].is_parent);
        assert_eq!(rows[1].text, "  ↳ ▾ Task child-early");
        assert_eq!(rows[2].text, "    ↳ Task grandchild");
        assert!(rows[2].is_parent == false);
        assert_eq!(rows[4].text, "Task other");
    }

    #[test]
    fn collapse_hides_descendants_only() {
        let tasks = vec![
            task("parent", Some(1), Priority::Low, None),
            task("child", Some(2), Priority::Low, Some("parent")),
            task("grandchild", Some(3), Priority::Low, Some("child")),
            task("sibling", Some(4), Priority::Low, None),
            task("sibling-child", Some(5), Priority::Low, Some("sibling")),
        ];
        let mut collapse = expanded();
        let all = reconcile(&tasks, &collapse, TreePolicy::default());
        assert_eq!(all.len(), 5);

        assert!(collapse.toggle(&TaskId::from("parent")));
        let collapsed = reconcile(&tasks, &collapse, TreePolicy::default());
        assert_eq!(ids(&collapsed), vec!["parent", "sibling", "sibling-child"]);
        assert_eq!(collapsed[0].text, "▸ Task parent");
        assert!(collapsed[0].is_collapsed);
        assert_eq!(collapsed[1..], all[3..]);

        assert!(collapse.toggle(&TaskId::from("parent")) == false);
        assert_eq!(reconcile(&tasks, &collapse, TreePolicy::default()), all);
    }

    #[test]
    fn collapsing_a_leaf_changes_nothing() {
        let tasks = vec![task("leaf", None, Priority::Low, None)];
        let mut collapse = expanded();
        collapse.toggle(&TaskId::from("leaf"));
        let rows = reconcile(&tasks, &collapse, TreePolicy::default());
        assert_eq!(rows[0].text, "Task leaf");
        assert!(rows[0].is_collapsed == false);
    }

    #[test]
    fn cycles_terminate() {
        let tasks = vec![
            task("a", Some(1), Priority::Low, Some("b")),
            task("b", Some(2), Priority::Low, Some("a")),
            task("c", Some(3), Priority::Low, Some("c")),
            task("d", Some(4), Priority::Low, Some("a")),
        ];
        let rows = reconcile(&tasks, &expanded(), TreePolicy::default());
        assert_eq!(ids(&rows), vec!["a", "b", "d", "c"]);
        assert_eq!(rows.iter().map(|r| r.depth).collect::<Vec<_>>(), vec![0, 1, 1, 0]);
        // "b" is a parent of "a", but "a" is already displayed above
        assert!(rows[1].is_parent);
        assert!(rows[3].is_parent == false);
    }

    #[test]
    fn dangling_parent_is_a_root() {
        let tasks = vec![task("orphan", None, Priority::Low, Some("gone"))];
        let rows = reconcile(&tasks, &expanded(), TreePolicy::default());
        assert_eq!(ids(&rows), vec!["orphan"]);
        assert_eq!(rows[0].depth, 0);
    }

    #[test]
    fn completed_tasks_are_hidden_by_default() {
        let mut parent = task("parent", Some(1), Priority::Low, None);
        parent.apply(crate::task::TaskFields {
            summary: "Task parent".to_string(),
            status: TaskStatus::Completed,
            ..Default::default()
        });
        let tasks = vec![parent, task("child", Some(2), Priority::Low, Some("parent"))];

        let rows = reconcile(&tasks, &expanded(), TreePolicy::default());
        assert_eq!(ids(&rows), vec!["child"]);
        assert_eq!(rows[0].depth, 0);

        let rows = reconcile(&tasks, &expanded(), TreePolicy { hide_completed: false });
        assert_eq!(ids(&rows), vec!["parent", "child"]);
        assert_eq!(rows[0].status_label, "Completed");
        assert_eq!(rows[1].depth, 1);
    }

    #[test]
    fn parents_are_listed() {
        let tasks = vec![
            task("parent", None, Priority::Low, None),
            task("child", None, Priority::Low, Some("parent")),
            task("orphan", None, Priority::Low, Some("gone")),
        ];
        let parents = parent_ids(&tasks, TreePolicy::default());
        assert_eq!(parents.len(), 1);
        assert!(parents.contains(&TaskId::from("parent")));
    }
}
