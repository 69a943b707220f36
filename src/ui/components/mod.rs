pub mod alert;
pub mod card_view;
pub mod draft_form;
pub mod login_form;
pub mod progress_bar;
pub mod stack_sidebar;
