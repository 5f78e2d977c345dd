pub mod exchange_climb;
