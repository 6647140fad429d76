pub mod wallet_command;
pub mod withdrawal_handler;
