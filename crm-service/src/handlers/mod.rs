pub mod audit;
pub mod auth;
pub mod company;
pub mod contact;
pub mod lead;
pub mod tenant;
pub mod user;
