pub mod inspect;
pub mod policies;
pub mod run;
