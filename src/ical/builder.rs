//! A module to build ICal files

use chrono::{DateTime, Utc};
use ics::properties::{Description, Due, LastModified, Priority, RelatedTo, Status, Summary};
use ics::{ICalendar, ToDo};

use crate::task::Task;

/// Create an iCal document containing a single `VTODO` from a [`crate::task::Task`].
///
/// Missing optional values (description, due date, priority, parent) are omitted rather than written empty.
pub fn build_from(task: &Task) -> String {
    let s_last_modified = format_date_time(task.last_modified());

    let mut todo = ToDo::new(
        task.id().to_string(),
        s_last_modified.clone(),
    );
    todo.push(Summary::new(ics::escape_text(task.summary())));
    if let Some(description) = task.description() {
        todo.push(Description::new(ics::escape_text(description)));
    }
    todo.push(Status::new(task.status().as_wire()));
    if let Some(priority) = task.priority().as_wire() {
        todo.push(Priority::new(priority.to_string()));
    }
    if let Some(due) = task.due() {
        todo.push(Due::new(format_date_time(due)));
    }
    todo.push(LastModified::new(s_last_modified));
    if let Some(parent) = task.parent_id() {
        todo.push(RelatedTo::new(parent.to_string()));
    }

    let mut calendar = ICalendar::new("2.0".to_string(), super::default_prod_id());
    calendar.add_todo(todo);

    calendar.to_string()
}

fn format_date_time(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::item::TaskId;
    use crate::task::{Priority as TaskPriority, TaskStatus};

    #[test]
    fn test_ical_from_task() {
        let modified = Utc.ymd(2025, 1, 2).and_hms(8, 30, 0);
        let task = Task::new_with_parameters(
            TaskId::from("4c9e3b1e-1f00-4b8a-9d4e-3a1b2c3d4e5f"),
            String::from("This is a task with ÜTF-8 characters"),
            None,
            TaskStatus::Completed,
            TaskPriority::High,
            Some(Utc.ymd(2025, 1, 3).and_hms(0, 0, 0)),
            Some(TaskId::from("the-parent")),
            modified,
        );

        let ical = build_from(&task);
        let lines: Vec<&str> = ical.split("\r\n").collect();
        assert_eq!(lines[0], "BEGIN:VCALENDAR");
        assert!(lines.contains(&format!("PRODID:{}", crate::ical::default_prod_id()).as_str()));
        assert!(lines.contains(&"BEGIN:VTODO"));
        assert!(lines.contains(&"UID:4c9e3b1e-1f00-4b8a-9d4e-3a1b2c3d4e5f"));
        assert!(lines.contains(&"DTSTAMP:20250102T083000Z"));
        assert!(lines.contains(&"SUMMARY:This is a task with ÜTF-8 characters"));
        assert!(lines.contains(&"STATUS:COMPLETED"));
        assert!(lines.contains(&"PRIORITY:1"));
        assert!(lines.contains(&"DUE:20250103T000000Z"));
        assert!(lines.contains(&"LAST-MODIFIED:20250102T083000Z"));
        assert!(lines.contains(&"RELATED-TO:the-parent"));
        assert!(ical.ends_with("END:VTODO\r\nEND:VCALENDAR\r\n"));
    }
}
