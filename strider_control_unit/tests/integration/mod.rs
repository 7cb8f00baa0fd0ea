mod config_loading;
mod control_properties;
mod helpers;
mod robot_scenarios;
mod safety_latch;
