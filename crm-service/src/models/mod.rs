pub mod audit_record;
pub mod company;
pub mod contact;
pub mod lead;
pub mod refresh_token;
pub mod role;
pub mod tenant;
pub mod user;

pub use audit_record::{AuditAction, AuditRecord, AuditRecordResponse};
pub use company::{Company, CompanyResponse, CreateCompanyRequest, UpdateCompanyRequest};
pub use contact::{Contact, ContactResponse, CreateContactRequest, UpdateContactRequest};
pub use lead::{CreateLeadRequest, Lead, LeadResponse, LeadStage, UpdateLeadRequest};
pub use refresh_token::RefreshToken;
pub use role::Role;
pub use tenant::{CreateTenantRequest, Tenant, TenantResponse};
pub use user::{CreateUserRequest, SanitizedUser, User};
