//! Terminal printers for status records.

use tasklane_core::StatusRecord;
use tasklane_core::app::StatusCounts;

pub fn print_record(record: &StatusRecord) {
    println!(
        "{} {}  {}  {}",
        record.status.symbol(),
        record.task_id,
        record.status,
        record.updated_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(result) = &record.result {
        println!("    result: {result}");
    }
    if let Some(error) = &record.error {
        println!("    error:  {error}");
    }
}

pub fn print_records(records: &[StatusRecord]) {
    if records.is_empty() {
        println!("no tasks found");
        return;
    }
    for record in records {
        print_record(record);
    }
}

pub fn print_counts(counts: &StatusCounts) {
    println!(
        "{} completed  {} processing  {} failed",
        counts.completed, counts.processing, counts.failed
    );
}
