mod common;
mod in_place;
mod recreate;
