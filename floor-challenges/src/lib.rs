pub mod floor_layout;
