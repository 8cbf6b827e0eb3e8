// Interactive shell state: one retained session per user, advanced one stage
// per action (upload → fields → intro → audio).

pub mod handlers;
pub mod models;
pub mod store;
pub mod workflow;
