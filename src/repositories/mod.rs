pub(crate) mod health;
pub(crate) mod problems;
pub(crate) mod sessions;
pub(crate) mod transcript;
