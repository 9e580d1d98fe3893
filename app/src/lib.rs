// ==============================================================================
// lib.rs - GWAS Processor Library
// ==============================================================================
// Description: Library interface for GWAS summary-statistics pipeline modules
// Author: Matt Barham
// Created: 2026-02-10
// Modified: 2026-02-10
// Version: 1.0.0
// ==============================================================================

pub mod cleaner;
pub mod downsampler;
pub mod messages;
pub mod models;
pub mod projector;
pub mod traces;
pub mod validator;
