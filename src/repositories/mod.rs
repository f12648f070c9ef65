pub mod expense_repository;
pub mod group_member_repository;
pub mod group_repository;
pub mod settlement_repository;
pub mod user_repository;

pub use expense_repository::ExpenseRepository;
pub use group_member_repository::GroupMemberRepository;
pub use group_repository::GroupRepository;
pub use settlement_repository::SettlementRepository;
pub use user_repository::UserRepository;
