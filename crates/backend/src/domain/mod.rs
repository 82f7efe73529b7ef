pub mod a101_contact;
pub mod a102_deal;
pub mod a103_pipeline;
