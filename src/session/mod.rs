pub mod battle;
pub mod defense;
pub mod question;
pub mod report;
pub mod war;
