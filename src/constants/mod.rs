pub mod fillers;
pub mod morphology;
pub mod prompts;
