pub(crate) mod bootstrap;
pub(crate) mod lander;
pub(crate) mod loop_runner;
pub(crate) mod platformer;
pub(crate) mod session;
