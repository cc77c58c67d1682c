// Entity Models
//
// Dog walker side:  Dog 1-N Feeding, Dog N-N Walk (dog_walks join table)
// Banking side:     User 1-N Account N-1 Bank
//
// Entities know their shape. Repositories (`repository`, `ledger`) know how
// to store them.

pub mod dog;
pub mod walk;
pub mod feeding;
pub mod user;
pub mod bank;
pub mod account;

pub use dog::{Dog, DogStatus, NewDog};
pub use walk::Walk;
pub use feeding::Feeding;
pub use user::User;
pub use bank::Bank;
pub use account::{Account, AccountType};
