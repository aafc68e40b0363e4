pub(crate) mod conversation;
pub(crate) mod openai;
pub(crate) mod prompts;
pub(crate) mod session_codes;
pub(crate) mod tutor_model;
