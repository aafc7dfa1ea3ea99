pub mod coerce;
pub mod rpgmaker;
pub mod script;
