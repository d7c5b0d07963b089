pub mod company;
pub mod employee;
pub mod lead;
pub mod user;

pub use company::Company;
pub use employee::Employee;
pub use lead::Lead;
pub use user::User;
