pub mod cors_gate;
