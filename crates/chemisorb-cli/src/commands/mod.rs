pub mod energies;
pub mod inspect;
pub mod run;
