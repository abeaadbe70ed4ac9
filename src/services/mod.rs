pub mod choice_set_builder;
pub mod evaluation_assembler;
pub mod evaluation_pipeline;
pub mod evaluation_service;
pub mod fallback_extractor;
pub mod grounding_validator;
pub mod item_builders;
pub mod level_config;
pub mod persistence_gate;
pub mod phase_steps;
pub mod repetition_tracker;
pub mod span_locator;
pub mod text_generation_service;
