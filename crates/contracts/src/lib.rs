//! Общие типы backend и UI: агрегаты CRM и DTO импорта CSV

pub mod domain;
pub mod shared;
pub mod system;
pub mod usecases;
