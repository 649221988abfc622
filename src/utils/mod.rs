pub(crate) mod async_task;

pub mod backoff;

#[cfg(test)]
mod async_task_test;
