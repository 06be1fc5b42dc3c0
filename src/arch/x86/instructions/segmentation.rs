use crate::define_read_reg_func;

define_read_reg_func!(cs, u16);
