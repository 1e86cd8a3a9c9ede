mod drive_enable;
mod jog_safety;
mod layouts;
mod link_recovery;
mod moves;
mod support;
