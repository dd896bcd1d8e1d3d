pub(crate) mod hierarchy;
pub(crate) mod lights;
pub(crate) mod transforms;
