pub mod store;

pub mod booking_repo;
pub use booking_repo::BookingRepository;
pub mod room_repo;
pub use room_repo::RoomRepository;
pub mod user_repo;
pub use user_repo::UserRepository;

#[cfg(test)]
pub mod memory;
