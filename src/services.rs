pub mod auth;
pub mod availability;
pub mod booking_service;
pub mod notification;
pub mod payment_gateway;
pub mod pricing;
pub mod room_service;
