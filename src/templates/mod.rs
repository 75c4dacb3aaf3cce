pub mod home_html;
