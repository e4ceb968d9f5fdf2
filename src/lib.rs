//! Unified Agent - Conversation routing and consultation core
//!
//! This crate routes each user turn of a multi-agent business assistant to
//! the right specialist (business planning, marketing, customer service,
//! task automation, mental health), keeps follow-ups with the agent that
//! answered last, and runs the marketing and customer service consultations
//! as stage machines that collect business details before drafting content
//! or reports.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
