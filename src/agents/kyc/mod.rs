//! Individual-subject verification agents

pub mod aamva;
pub mod email_phone_ip;
pub mod govt_id;
pub mod id_check;
pub mod id_selfie;
pub mod initial_diligence;
pub mod login_activities;
pub mod ofac;
pub mod payment_behavior;
pub mod sift;

pub use aamva::AamvaVerificationAgent;
pub use email_phone_ip::EmailPhoneIpVerificationAgent;
pub use govt_id::GovtIdVerificationAgent;
pub use id_check::IdCheckAgent;
pub use id_selfie::IdSelfieVerificationAgent;
pub use initial_diligence::InitialDiligenceAgent;
pub use login_activities::LoginActivitiesAgent;
pub use ofac::OfacVerificationAgent;
pub use payment_behavior::PaymentBehaviorAgent;
pub use sift::SiftVerificationAgent;
