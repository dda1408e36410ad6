pub mod health;
pub mod receipts;
