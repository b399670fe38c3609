mod dual_test;
