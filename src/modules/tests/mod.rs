pub mod rotation_cycle;
