pub mod card_grid;
pub mod controls;
pub mod datatable;
