pub(crate) mod security_policy;
