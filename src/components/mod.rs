pub mod canvas_view;
pub mod controls;
pub mod manual;
