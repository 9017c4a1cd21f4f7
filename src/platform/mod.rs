pub(crate) mod macos;
