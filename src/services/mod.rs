pub mod expense_service;
pub mod group_service;
pub mod settlement_service;

pub use expense_service::{ExpenseService, ExpenseUpdate, NewExpense};
pub use group_service::{GroupDeletion, GroupDetail, GroupOverview, GroupService};
pub use settlement_service::{
    NewSettlement, OutstandingEntry, SettlementOutcome, SettlementService, SettlementsOverview,
};
