pub mod task_elements;
