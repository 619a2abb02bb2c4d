// src/lib.rs
//! Vehicle-centric 3D situational view.
//!
//! The engine composes a live scene around a moving vehicle: ground grid,
//! flight trail, georeferenced imagery, waypoints, a target marker and
//! optional RGB-D sensor overlays, plus a screen-space HUD. Everything is
//! expressed in a local tangent plane (NED for the vehicle, ENU for rendering)
//! with an optional UTM/geodetic georeference.

pub mod app;
pub mod camera;
pub mod config;
pub mod driver;
pub mod frames;
pub mod hud;
pub mod interaction;
pub mod picking;
pub mod pose;
pub mod renderer;
pub mod scene;
pub mod trail;
pub mod ui;
pub mod waypoint;
