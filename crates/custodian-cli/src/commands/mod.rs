pub(crate) mod admin;
pub(crate) mod link;
pub(crate) mod session;
