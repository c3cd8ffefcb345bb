pub mod in_memory;
pub mod mongo;
pub mod redis;
