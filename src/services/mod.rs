pub mod due_day;
pub mod lease_lifecycle;
pub mod overdue;
pub mod payment_schedule;
pub mod payments;
pub mod scheduler;
