pub mod evaluation_handler;

pub use evaluation_handler::{
    configure, generate_evaluation, get_evaluation, health_check, health_check_ready,
};
