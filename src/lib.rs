//! voxpair
//!
//! 语音助手设备配对代理：向后端申请配对码、播报给用户、轮询激活并保存设备身份。

pub mod bootstrap;
