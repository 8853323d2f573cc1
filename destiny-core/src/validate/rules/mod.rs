pub(crate) mod calls;
pub(crate) mod contract;
pub(crate) mod manifest;
