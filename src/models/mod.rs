pub mod expense;
pub mod group;
pub mod group_member;
pub mod settlement;
pub mod user;

pub use expense::{Category, Currency, Expense, Split, SplitType};
pub use group::Group;
pub use group_member::{GroupMember, MemberRole};
pub use settlement::{PaymentMethod, Settlement, SettlementStatus};
pub use user::User;
