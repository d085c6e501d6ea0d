pub mod artist;
pub mod band;
pub mod composition;
pub mod genre;
pub mod manufacturer_profile;
pub mod order;
pub mod record;
pub mod release;
pub mod user;
pub mod web_session;
