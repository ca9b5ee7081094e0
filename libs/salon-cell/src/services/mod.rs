pub mod schedule_rules;
