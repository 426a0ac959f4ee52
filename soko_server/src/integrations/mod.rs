mod daraja;

pub use daraja::DarajaGateway;
